use crate::error::EnergyError;
use crate::geo_api::{GeoApi, LivePower, TotalConsumption};
use crate::reading::{Commodity, Reading, ReadingType};
use crate::session::SessionCache;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of energy readings
#[async_trait]
pub trait EnergyReader: Send + Sync {
    /// Current power draw per commodity, in watts
    async fn live_readings(&self) -> Result<Vec<Reading>, EnergyError>;

    /// Cumulative consumption per commodity. Typically kWh for electricity,
    /// m3 for gas.
    async fn meter_readings(&self) -> Result<Vec<Reading>, EnergyError>;
}

/// Reads the geo cloud API, reusing credentials from a shared [`SessionCache`]
pub struct GeoEnergyReader {
    api: GeoApi,
    session: Arc<SessionCache>,
}

impl GeoEnergyReader {
    pub fn new(api: GeoApi, session: Arc<SessionCache>) -> Self {
        Self { api, session }
    }

    async fn credentials(&self) -> Result<(String, String), EnergyError> {
        let access_token = self.session.token().await?;
        let system_id = self.session.system_id(&access_token).await?;
        Ok((access_token, system_id))
    }
}

#[async_trait]
impl EnergyReader for GeoEnergyReader {
    async fn live_readings(&self) -> Result<Vec<Reading>, EnergyError> {
        let (access_token, system_id) = self.credentials().await?;
        let live = self
            .api
            .live_data(&access_token, &system_id)
            .await
            .map_err(EnergyError::Upstream)?;
        Ok(live_to_readings(&live.power))
    }

    async fn meter_readings(&self) -> Result<Vec<Reading>, EnergyError> {
        let (access_token, system_id) = self.credentials().await?;
        let periodic = self
            .api
            .periodic_data(&access_token, &system_id)
            .await
            .map_err(EnergyError::Upstream)?;
        Ok(meter_to_readings(&periodic.total_consumption_list))
    }
}

fn parse_commodity(tag: &str) -> Option<Commodity> {
    match tag {
        "ELECTRICITY" => Some(Commodity::Electricity),
        "GAS_ENERGY" | "GAS" => Some(Commodity::Gas),
        _ => None,
    }
}

fn live_to_readings(entries: &[LivePower]) -> Vec<Reading> {
    entries
        .iter()
        .filter(|entry| entry.value_available)
        .filter_map(|entry| {
            parse_commodity(&entry.commodity_type)
                .map(|commodity| Reading::new(commodity, ReadingType::Live, entry.watts))
        })
        .collect()
}

fn meter_to_readings(entries: &[TotalConsumption]) -> Vec<Reading> {
    entries
        .iter()
        .filter(|entry| entry.value_available)
        .filter_map(|entry| {
            parse_commodity(&entry.commodity_type).map(|commodity| {
                Reading::new(commodity, ReadingType::Meter, entry.total_consumption)
            })
        })
        .collect()
}
