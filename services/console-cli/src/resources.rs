//! Dashboard resource catalogue
//!
//! Maps the back-office list and detail screens to their API paths so the
//! console can page through them the same way the grid does.

use clap::ValueEnum;

use crate::error::CliError;

/// Resources with a paginated list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resource {
    Users,
    GasStations,
    GasPumps,
    Payments,
    Campaigns,
    Levels,
    CustomerLevels,
    Synchronizations,
}

/// Grid paging state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: String::new(),
        }
    }
}

impl Resource {
    fn base_path(self) -> &'static str {
        match self {
            Resource::Users => "/api/v1/users",
            Resource::GasStations => "/api/v1/gas-stations",
            Resource::GasPumps => "/api/v1/gas-pumps",
            Resource::Payments => "/api/v1/payments",
            Resource::Campaigns => "/api/v1/campaigns",
            Resource::Levels => "/api/v1/elegibility/levels",
            Resource::CustomerLevels => "/api/v1/elegibility/customers/levels",
            Resource::Synchronizations => "/api/v1/synchronizations",
        }
    }

    /// Path of the paginated list, query string included.
    ///
    /// Synchronizations are listed per job type and have no search box.
    pub fn list_path(self, page: &Page, sync_type: Option<&str>) -> Result<String, CliError> {
        let base = self.base_path();
        if self == Resource::Synchronizations {
            let sync_type = sync_type.ok_or(CliError::MissingSyncType)?;
            return Ok(format!(
                "{base}?type={}&page={}&limit={}",
                encode_query_value(sync_type),
                page.page,
                page.limit
            ));
        }
        Ok(format!(
            "{base}?page={}&limit={}&search={}",
            page.page,
            page.limit,
            encode_query_value(&page.search)
        ))
    }

    /// Path of a single record.
    ///
    /// Only users and campaigns have a plain detail endpoint; synchronization
    /// details are paginated. The other resources are mutate-only by id.
    pub fn detail_path(self, id: &str, page: u32, limit: u32) -> Result<String, CliError> {
        let id = encode_query_value(id);
        match self {
            Resource::Users | Resource::Campaigns => Ok(format!("{}/{id}", self.base_path())),
            Resource::Synchronizations => Ok(format!(
                "{}/{id}/details?limit={limit}&page={page}",
                self.base_path()
            )),
            Resource::GasStations
            | Resource::GasPumps
            | Resource::Payments
            | Resource::Levels
            | Resource::CustomerLevels => Err(CliError::NoDetailEndpoint(self)),
        }
    }

    pub fn name(self) -> String {
        self.to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_else(|| format!("{self:?}"))
    }
}

/// Path of the latest synchronization of a job type.
pub fn last_sync_path(sync_type: &str) -> String {
    format!(
        "/api/v1/synchronizations/last?type={}",
        encode_query_value(sync_type)
    )
}

/// Path that starts a synchronization against the POS system.
pub const SYNC_NOW_PATH: &str = "/api/v1/synchronizations/now";

/// Path of the logged-in user's profile.
pub const CURRENT_USER_PATH: &str = "/api/v1/users/me";

/// Percent-encode a query parameter value (RFC 3986 unreserved set kept).
pub fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
