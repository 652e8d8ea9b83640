pub mod address;
pub mod auction;
pub mod job;
pub mod product;
pub mod shipment;
pub mod shipper;
pub mod user;
