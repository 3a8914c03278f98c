pub mod medicine;
pub mod order;
pub mod order_medicine;
pub mod sale;
pub mod vendor;
pub mod vendor_medicine;
