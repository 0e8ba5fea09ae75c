use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::office::Office;

/// Group name for offices without a party or province.
pub const UNKNOWN: &str = "Unknown";

fn party_of(office: &Office) -> &str {
    office.party.as_deref().unwrap_or(UNKNOWN)
}

fn province_of(office: &Office) -> &str {
    office.province.as_deref().unwrap_or(UNKNOWN)
}

/// Party and province selection of the office list. `None` means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeFilter {
    pub party: Option<String>,
    pub province: Option<String>,
}

impl OfficeFilter {
    pub fn matches(&self, office: &Office) -> bool {
        self.party.as_deref().map_or(true, |p| party_of(office) == p)
            && self.province.as_deref().map_or(true, |p| province_of(office) == p)
    }

    /// Matching offices in their original order.
    pub fn apply(&self, offices: &[Office]) -> Vec<Office> {
        offices.iter().filter(|o| self.matches(o)).cloned().collect()
    }
}

/// Distinct values with their office counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub parties: Vec<(String, usize)>,
    pub provinces: Vec<(String, usize)>,
}

impl Facets {
    /// Counts over the whole list, alphabetical with "Unknown" last.
    pub fn of(offices: &[Office]) -> Self {
        let mut parties: BTreeMap<&str, usize> = BTreeMap::new();
        let mut provinces: BTreeMap<&str, usize> = BTreeMap::new();
        for office in offices {
            *parties.entry(party_of(office)).or_default() += 1;
            *provinces.entry(province_of(office)).or_default() += 1;
        }
        Self {
            parties: unknown_last(parties),
            provinces: unknown_last(provinces),
        }
    }
}

fn unknown_last(counts: BTreeMap<&str, usize>) -> Vec<(String, usize)> {
    let (mut known, unknown): (Vec<_>, Vec<_>) = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .partition(|(name, _)| name != UNKNOWN);
    known.extend(unknown);
    known
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::map_tile::Coordinate;
    use crate::offices::office::{OfficeCategory, OfficeId};

    fn office(id: &str, party: Option<&str>, province: Option<&str>) -> Office {
        let mut office = Office::new(
            OfficeId::new(id),
            id,
            Coordinate::new(-30.0, 25.0),
            "",
            OfficeCategory::BranchOffice,
        );
        office.party = party.map(str::to_string);
        office.province = province.map(str::to_string);
        office
    }

    fn offices() -> Vec<Office> {
        vec![
            office("a", Some("DA"), Some("Western Cape")),
            office("b", Some("ANC"), Some("Gauteng")),
            office("c", None, Some("Gauteng")),
            office("d", Some("DA"), None),
            office("e", Some("ANC"), Some("Free State")),
        ]
    }

    fn ids(offices: &[Office]) -> Vec<&str> {
        offices.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn default_filter_keeps_everything() {
        assert_eq!(ids(&OfficeFilter::default().apply(&offices())), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn filters_combine() {
        let offices = offices();
        let anc = OfficeFilter {
            party: Some("ANC".into()),
            province: None,
        };
        assert_eq!(ids(&anc.apply(&offices)), ["b", "e"]);

        let anc_gauteng = OfficeFilter {
            province: Some("Gauteng".into()),
            ..anc
        };
        assert_eq!(ids(&anc_gauteng.apply(&offices)), ["b"]);
    }

    #[test]
    fn unknown_matches_missing_values() {
        let filter = OfficeFilter {
            party: Some(UNKNOWN.into()),
            province: None,
        };
        assert_eq!(ids(&filter.apply(&offices())), ["c"]);
    }

    #[test]
    fn facets_sorted_with_unknown_last() {
        let facets = Facets::of(&offices());
        assert_eq!(
            facets.parties,
            vec![("ANC".to_string(), 2), ("DA".to_string(), 2), ("Unknown".to_string(), 1)]
        );
        assert_eq!(
            facets.provinces,
            vec![
                ("Free State".to_string(), 1),
                ("Gauteng".to_string(), 2),
                ("Western Cape".to_string(), 1),
                ("Unknown".to_string(), 1),
            ]
        );
    }
}
