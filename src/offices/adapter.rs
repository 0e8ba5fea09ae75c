use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::config::NocoDbConfig;
use crate::error::{LocatorError, Result};
use crate::map::map_tile::Coordinate;

use super::office::{AdminContact, Office, OfficeCategory, OfficeId, Representative};

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 1000;

#[derive(Debug, Deserialize)]
struct RowPage {
    #[serde(default)]
    list: Vec<Value>,
    #[serde(rename = "pageInfo", default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    is_last_page: Option<bool>,
}

/// Loads office records from a NocoDB table and turns them into [`Office`]s.
#[derive(Debug, Clone)]
pub struct OfficeSource {
    client: reqwest::Client,
    config: NocoDbConfig,
}

impl OfficeSource {
    pub fn new(client: reqwest::Client, config: NocoDbConfig) -> Self {
        Self { client, config }
    }

    /// All offices with a usable coordinate. Serves the demo data set when no
    /// table is configured.
    pub async fn fetch_offices(&self) -> Result<Vec<Office>> {
        let Some((base, table)) = self.config.table() else {
            warn!("NocoDB base/table id not configured, using demo data");
            return Ok(demo_offices());
        };

        let rows = self.fetch_rows(base, table).await.map_err(|e| match e {
            LocatorError::DataUnavailable(_) => e,
            other => LocatorError::DataUnavailable(other.to_string()),
        })?;
        let offices = offices_from_rows(&rows);
        info!("loaded {} offices from {} rows", offices.len(), rows.len());
        Ok(offices)
    }

    async fn fetch_rows(&self, base: &str, table: &str) -> Result<Vec<Value>> {
        let url = format!(
            "{}/api/v1/db/data/noco/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            base,
            table
        );

        let mut rows = Vec::new();
        for page in 0..MAX_PAGES {
            let offset = page * PAGE_SIZE;
            debug!("fetching office rows {} at offset {}", url, offset);

            let response = self
                .client
                .get(&url)
                .header("xc-token", &self.config.api_token)
                .query(&[("limit", PAGE_SIZE), ("offset", offset)])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(LocatorError::DataUnavailable(format!(
                    "{} returned {}",
                    url,
                    response.status()
                )));
            }

            let page: RowPage = response.json().await?;
            let received = page.list.len();
            rows.extend(page.list);

            let last = match page.page_info.and_then(|info| info.is_last_page) {
                Some(last) => last,
                None => received < PAGE_SIZE,
            };
            if last || received == 0 {
                break;
            }
        }
        Ok(rows)
    }
}

/// Rows without a parseable coordinate are dropped.
pub fn offices_from_rows(rows: &[Value]) -> Vec<Office> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| office_from_row(index, row))
        .collect()
}

pub fn office_from_row(index: usize, row: &Value) -> Option<Office> {
    let coordinate = match text(row, &["Latlon"]) {
        Some(raw) => match parse_lat_lon(&raw) {
            Some(coordinate) => coordinate,
            None => {
                warn!("could not parse lat/lon from {raw:?}");
                return None;
            }
        },
        None => return None,
    };

    let id = text(row, &["Id", "id"]).unwrap_or_else(|| format!("row-{index}"));
    let name = text(row, &["PcoName", "pcoName"]).unwrap_or_else(|| "Unknown Office".to_string());
    let address = text(row, &["Address"]).unwrap_or_else(|| "No address provided".to_string());

    let mut office = Office::new(
        OfficeId::new(id),
        name,
        coordinate,
        address,
        category_of(row),
    );
    office.province = text(row, &["Province"]);
    office.party = text(row, &["Party", "MP Select", "mpSelect"]);
    office.representative = text(row, &["MP Name", "MPName", "MP"]).map(|name| Representative {
        name,
        image: text(row, &["MP Image", "MPImage"]),
        link: text(row, &["MP Link", "MPLink"]),
    });
    Some(office.with_admin(AdminContact {
        person: text(row, &["AdminPerson"]),
        phone: text(row, &["AdminPhone"]),
        email: text(row, &["AdminEmail"]),
    }))
}

/// Accepts "lat,lon", "lat;lon" and "lat lon".
pub fn parse_lat_lon(raw: &str) -> Option<Coordinate> {
    let cleaned = raw.trim();
    for separator in [',', ';'] {
        if let Some((lat, lon)) = cleaned.split_once(separator) {
            if let Some(coordinate) = parse_pair(lat, lon) {
                return Some(coordinate);
            }
        }
    }
    let mut parts = cleaned.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(lat), Some(lon)) => parse_pair(lat, lon),
        _ => None,
    }
}

fn parse_pair(lat: &str, lon: &str) -> Option<Coordinate> {
    let lat: f64 = lat.trim().parse().ok()?;
    // Trailing fields after the longitude are ignored.
    let lon: f64 = lon.trim().split([',', ';']).next()?.trim().parse().ok()?;
    let coordinate = Coordinate::new(lat, lon);
    coordinate.is_valid().then_some(coordinate)
}

fn category_of(row: &Value) -> OfficeCategory {
    if text(row, &["Part"]).is_some_and(|part| part.to_lowercase().contains("main")) {
        OfficeCategory::MainOffice
    } else if text(row, &["Province"]).is_some() {
        OfficeCategory::ProvincialOffice
    } else if text(row, &["MP"]).is_some() {
        OfficeCategory::MpOffice
    } else {
        OfficeCategory::BranchOffice
    }
}

/// First non-empty value among `keys`, numbers rendered as text.
fn text(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Offices shown when no backend table is configured.
pub fn demo_offices() -> Vec<Office> {
    let office = |id: &str, name: &str, lat: f64, lon: f64, address: &str, category: OfficeCategory| {
        Office::new(OfficeId::new(id), name, Coordinate::new(lat, lon), address, category)
    };
    let admin = |person: &str, phone: &str, email: &str| AdminContact {
        person: Some(person.to_string()),
        phone: Some(phone.to_string()),
        email: Some(email.to_string()),
    };
    let mp = |name: &str| Representative {
        name: name.to_string(),
        image: None,
        link: None,
    };

    vec![
        office(
            "1",
            "Cape Town Parliamentary Office",
            -33.9249,
            18.4241,
            "90 Plein Street, Cape Town, 8000",
            OfficeCategory::MainOffice,
        )
        .with_province("Western Cape")
        .with_party("DA")
        .with_representative(mp("John Smith"))
        .with_admin(admin("Jane Doe", "+27 21 123 4567", "admin.capetown@pmg.org.za")),
        office(
            "2",
            "Johannesburg Parliamentary Office",
            -26.2041,
            28.0473,
            "123 Commissioner Street, Johannesburg, 2000",
            OfficeCategory::ProvincialOffice,
        )
        .with_province("Gauteng")
        .with_party("ANC")
        .with_representative(mp("Mary Johnson"))
        .with_admin(admin("Peter Wilson", "+27 11 987 6543", "admin.joburg@pmg.org.za")),
        office(
            "3",
            "Durban Parliamentary Office",
            -29.8587,
            31.0218,
            "45 Victoria Street, Durban, 4000",
            OfficeCategory::ProvincialOffice,
        )
        .with_province("KwaZulu-Natal")
        .with_party("EFF")
        .with_representative(mp("David Brown"))
        .with_admin(admin("Sarah Miller", "+27 31 456 7890", "admin.durban@pmg.org.za")),
        office(
            "4",
            "Pietermaritzburg Office",
            -29.6020,
            30.3794,
            "12 Church Street, Pietermaritzburg, 3200",
            OfficeCategory::BranchOffice,
        )
        .with_province("KwaZulu-Natal")
        .with_party("IFP")
        .with_representative(mp("Sarah Williams"))
        .with_admin(admin("Michael Johnson", "+27 33 345 6789", "admin.pmb@pmg.org.za")),
        office(
            "5",
            "Bloemfontein Office",
            -29.0852,
            26.1596,
            "78 President Brand Street, Bloemfontein, 9300",
            OfficeCategory::ProvincialOffice,
        )
        .with_province("Free State")
        .with_party("DA")
        .with_representative(mp("Robert Davis"))
        .with_admin(admin("Linda van der Merwe", "+27 51 234 5678", "admin.bloem@pmg.org.za")),
    ]
}
