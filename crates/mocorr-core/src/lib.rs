pub mod align;
pub mod consts;
pub mod deform;
pub mod error;
pub mod frame;
pub mod io;
pub mod movie;
pub mod pipeline;
pub mod raster;
