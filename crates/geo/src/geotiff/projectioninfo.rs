#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelType {
    #[default]
    Projected,
    Geographic,
    Geocentric,
}

impl ModelType {
    pub fn geokey_value(&self) -> u16 {
        match self {
            ModelType::Projected => 1,
            ModelType::Geographic => 2,
            ModelType::Geocentric => 3,
        }
    }
}

/// Coordinate system information stored in the GeoKey directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionInfo {
    pub model_type: ModelType,
    pub projected_epsg: Option<u16>,
    pub geographic_epsg: Option<u16>,
}

impl ProjectionInfo {
    /// Derive the projection info from a crs identifier, only "EPSG:<code>" identifiers are understood
    pub fn from_crs(crs: &str) -> Option<Self> {
        let code = crs.strip_prefix("EPSG:")?;
        let epsg = match code.trim().parse::<u16>() {
            Ok(epsg) => epsg,
            Err(_) => {
                log::warn!("EPSG code out of range for GeoTIFF storage: {crs}");
                return None;
            }
        };

        // Geographic coordinate systems live in the 4000 range of the EPSG registry
        if (4000..5000).contains(&epsg) {
            Some(ProjectionInfo {
                model_type: ModelType::Geographic,
                projected_epsg: None,
                geographic_epsg: Some(epsg),
            })
        } else {
            Some(ProjectionInfo {
                model_type: ModelType::Projected,
                projected_epsg: Some(epsg),
                geographic_epsg: None,
            })
        }
    }

    pub fn epsg(&self) -> Option<u16> {
        match self.model_type {
            ModelType::Projected => self.projected_epsg.or(self.geographic_epsg),
            ModelType::Geographic => self.geographic_epsg,
            ModelType::Geocentric => None,
        }
    }

    pub fn crs(&self) -> String {
        self.epsg().map(|epsg| format!("EPSG:{epsg}")).unwrap_or_default()
    }
}
