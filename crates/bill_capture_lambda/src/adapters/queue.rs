use super::AdapterError;

pub trait MessagePublisher {
    fn publish(&self, body: &str) -> Result<(), AdapterError>;
}
