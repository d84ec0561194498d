use crate::error::BenchmarkError;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Regional<T> {
    clients: BTreeMap<String, T>,
}

impl<T> Regional<T> {
    pub fn build<F>(regions: &[String], mut make: F) -> Self
    where
        F: FnMut(&str) -> T,
    {
        let clients = regions
            .iter()
            .map(|region| (region.clone(), make(region)))
            .collect();
        Self { clients }
    }

    pub fn get(&self, region: &str) -> Result<&T, BenchmarkError> {
        self.clients
            .get(region)
            .ok_or_else(|| BenchmarkError::UnknownRegion(region.to_string()))
    }
}

impl<T> FromIterator<(String, T)> for Regional<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            clients: iter.into_iter().collect(),
        }
    }
}
