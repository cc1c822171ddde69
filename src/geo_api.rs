use serde_derive::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.geotogether.com";

/// Thin client for the geo "Home" cloud API
#[derive(Clone)]
pub struct GeoApi {
    base_url: String,
    client: reqwest::Client,
}

impl GeoApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, reqwest::Error> {
        self.client
            .post(format!("{}/usersservice/v2/login", self.base_url))
            .json(&LoginRequest {
                identity: username,
                password,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn device_data(&self, access_token: &str) -> Result<DeviceData, reqwest::Error> {
        self.client
            .get(format!(
                "{}/api/userapi/v2/user/detail-systems?systemDetails=true",
                self.base_url
            ))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn live_data(&self, access_token: &str, system_id: &str) -> Result<LiveData, reqwest::Error> {
        self.client
            .get(format!(
                "{}/api/userapi/system/smets2-live-data/{}",
                self.base_url, system_id
            ))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn periodic_data(
        &self,
        access_token: &str,
        system_id: &str,
    ) -> Result<PeriodicData, reqwest::Error> {
        self.client
            .get(format!(
                "{}/api/userapi/system/smets2-periodic-data/{}",
                self.base_url, system_id
            ))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceData {
    #[serde(default)]
    pub system_details: Vec<SystemDetails>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDetails {
    pub system_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveData {
    #[serde(default)]
    pub power: Vec<LivePower>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePower {
    #[serde(rename = "type")]
    pub commodity_type: String,
    #[serde(default)]
    pub watts: f64,
    #[serde(default)]
    pub value_available: bool,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicData {
    #[serde(default)]
    pub total_consumption_list: Vec<TotalConsumption>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalConsumption {
    pub commodity_type: String,
    #[serde(default)]
    pub total_consumption: f64,
    #[serde(default)]
    pub value_available: bool,
}
