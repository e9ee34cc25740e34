//! Static asset lookups for drivers and constructors.

use axum::extract::Path;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::services::assets::{find_constructor, find_driver, ConstructorAsset, DriverAsset};

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverAssetResponse {
    pub driver_id: String,
    pub display_name: String,
    pub image_file: String,
    /// Display name of the driver's constructor
    pub constructor: String,
}

impl From<&DriverAsset> for DriverAssetResponse {
    fn from(a: &DriverAsset) -> Self {
        Self {
            driver_id: a.api_name.to_string(),
            display_name: a.display_name.to_string(),
            image_file: a.image_file.to_string(),
            constructor: a.constructor.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConstructorAssetResponse {
    pub constructor_id: String,
    pub display_name: String,
    pub logo_file: String,
    pub car_design_file: String,
}

impl From<&ConstructorAsset> for ConstructorAssetResponse {
    fn from(a: &ConstructorAsset) -> Self {
        Self {
            constructor_id: a.api_name.to_string(),
            display_name: a.display_name.to_string(),
            logo_file: a.logo_file.to_string(),
            car_design_file: a.car_design_file.to_string(),
        }
    }
}

/// Look up a driver's portrait and display name.
#[utoipa::path(
    get,
    path = "/api/v1/assets/drivers/{driver_id}",
    tag = "Assets",
    params(("driver_id" = String, Path, description = "Feed driver id, e.g. \"max_verstappen\"")),
    responses(
        (status = 200, description = "Driver asset", body = DriverAssetResponse),
        (status = 404, description = "Unknown driver", body = ErrorResponse),
    )
)]
pub async fn get_driver_asset(
    Path(driver_id): Path<String>,
) -> Result<Json<DriverAssetResponse>, AppError> {
    find_driver(&driver_id)
        .map(|a| Json(a.into()))
        .ok_or_else(|| AppError::NotFound(format!("No assets for driver '{}'", driver_id)))
}

/// Look up a constructor's logo and car design.
#[utoipa::path(
    get,
    path = "/api/v1/assets/constructors/{constructor_id}",
    tag = "Assets",
    params(("constructor_id" = String, Path, description = "Feed constructor id or name, e.g. \"red_bull\"")),
    responses(
        (status = 200, description = "Constructor asset", body = ConstructorAssetResponse),
        (status = 404, description = "Unknown constructor", body = ErrorResponse),
    )
)]
pub async fn get_constructor_asset(
    Path(constructor_id): Path<String>,
) -> Result<Json<ConstructorAssetResponse>, AppError> {
    find_constructor(&constructor_id)
        .map(|a| Json(a.into()))
        .ok_or_else(|| {
            AppError::NotFound(format!("No assets for constructor '{}'", constructor_id))
        })
}
