pub mod payload;
pub mod post;

pub use payload::DeliveryPayload;
pub use post::NormalizedPost;
