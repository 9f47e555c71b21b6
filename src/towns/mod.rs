//! Town management: the only writer of the document store

mod service;

pub use service::TownService;
