// Service exports
pub mod board;
pub mod classifier;
pub mod email;
pub mod geocoder;
pub mod store;

pub use board::{BoardClient, BoardError, BoardItem};
pub use classifier::{Classification, ClassifierError, LlmClassifier, NoticeClassifier};
pub use email::{EmailError, EmailMessage, EmailSink, HttpEmailSink};
pub use geocoder::{GeocodeError, Geocoder, NominatimGeocoder};
pub use store::{JsonFileStore, StoreError, UserStore};
