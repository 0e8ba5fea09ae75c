use std::fmt;

use serde::{Deserialize, Serialize};

use crate::map::map_tile::Coordinate;

/// Stable identity of an office record, as given by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfficeId(String);

impl OfficeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfficeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfficeCategory {
    MainOffice,
    ProvincialOffice,
    MpOffice,
    BranchOffice,
}

impl OfficeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            OfficeCategory::MainOffice => "Main Office",
            OfficeCategory::ProvincialOffice => "Provincial Office",
            OfficeCategory::MpOffice => "MP Office",
            OfficeCategory::BranchOffice => "Branch Office",
        }
    }
}

impl fmt::Display for OfficeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The member of parliament attached to an office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    pub name: String,
    pub image: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminContact {
    pub person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl AdminContact {
    pub fn is_empty(&self) -> bool {
        self.person.is_none() && self.phone.is_none() && self.email.is_none()
    }
}

/// A located constituency office. Built once by the data adapter and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub coordinate: Coordinate,
    pub address: String,
    pub category: OfficeCategory,
    pub province: Option<String>,
    pub party: Option<String>,
    pub representative: Option<Representative>,
    pub admin: Option<AdminContact>,
}

impl Office {
    pub fn new(
        id: OfficeId,
        name: impl Into<String>,
        coordinate: Coordinate,
        address: impl Into<String>,
        category: OfficeCategory,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            coordinate,
            address: address.into(),
            category,
            province: None,
            party: None,
            representative: None,
            admin: None,
        }
    }

    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = Some(province.into());
        self
    }

    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.party = Some(party.into());
        self
    }

    pub fn with_representative(mut self, representative: Representative) -> Self {
        self.representative = Some(representative);
        self
    }

    pub fn with_admin(mut self, admin: AdminContact) -> Self {
        self.admin = Some(admin).filter(|a| !a.is_empty());
        self
    }

    pub fn has_valid_coordinate(&self) -> bool {
        self.coordinate.is_valid()
    }
}
