use const_format::concatcp;

pub const USER_ID_HEADER: &str = "X-User-Id";

pub const MILEAGE: &str = "/mileage/";
pub const MILEAGE_ADD: &str = concatcp!(MILEAGE, "add");
pub const MILEAGE_WEEKLY: &str = concatcp!(MILEAGE, "weekly");

// Response fields
pub const ENTRIES: &str = "entries";
pub const WEEKLY_MILEAGE: &str = "weekly_mileage";
pub const ERROR: &str = "error";
pub const DETAIL: &str = "detail";
