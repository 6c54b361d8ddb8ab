pub mod address;
pub mod scorer;
pub mod similarity;
pub mod venue_matcher;
