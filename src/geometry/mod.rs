// binfronts/src/geometry/mod.rs

mod aoi;
mod cache;
mod layout;
mod window;

pub use aoi::{AoiEntry, AoiIndex, AoiRow};
pub use cache::GeometryCache;
pub use layout::{
    bins_in_row, column_longitude, row_latitude, row_layout, BinLocation, RowLayout, RowSpec,
};
pub use window::Window;
