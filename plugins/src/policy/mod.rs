pub mod local_delivery;

pub use local_delivery::LocalDeliveryFilter;
