pub mod image_io;
pub mod manifest;
pub mod movie_io;
pub mod mrc;

pub use image_io::{load_image, save_image, save_image_stretched};
pub use movie_io::{load_movie_manifest, load_movie_stack, save_movie_manifest, save_movie_stack};
pub use mrc::{read_stack, write_stack, MrcHeader, MrcMode, MrcReader, MrcWriter};
