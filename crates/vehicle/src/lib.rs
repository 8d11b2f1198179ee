//! Vehicle data services for AskMyCar: VIN decoding via NHTSA vPIC and
//! representative vehicle photos from Wikipedia or Brave image search.

pub mod cache;
pub mod error;
pub mod image;
pub mod nhtsa;

pub use cache::ImageCache;
pub use error::VehicleError;
pub use image::{CarImages, ImageLookup, wiki_titles};
pub use nhtsa::{DecodedVehicle, VinDecoder, normalize_vin};
