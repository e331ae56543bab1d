/// Image decoding and the image-source boundary.
pub mod image;
