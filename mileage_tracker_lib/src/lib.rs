pub mod geo_util;
pub mod mileage_record;
pub mod position_fix;
pub mod trip;
