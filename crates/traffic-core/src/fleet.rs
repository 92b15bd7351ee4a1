//! Concurrent store of live cars.

use dashmap::DashMap;

use crate::models::{Car, Coordinate};

/// Thread-safe car store keyed by car id.
///
/// The tick driver is the only writer of a car after it is inserted; other
/// callers read snapshots.
#[derive(Debug, Default)]
pub struct CarFleet {
    cars: DashMap<String, Car>,
}

impl CarFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, car: Car) {
        self.cars.insert(car.id.clone(), car);
    }

    pub fn get(&self, id: &str) -> Option<Car> {
        self.cars.get(id).map(|entry| entry.value().clone())
    }

    /// Apply `f` to a live car. Returns false if it was removed meanwhile.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Car),
    {
        match self.cars.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<Car> {
        self.cars.remove(id).map(|(_, car)| car)
    }

    /// Point-in-time copy of every car.
    pub fn snapshot(&self) -> Vec<Car> {
        self.cars.iter().map(|r| r.value().clone()).collect()
    }

    pub fn path_for(&self, id: &str) -> Option<Vec<Coordinate>> {
        self.cars.get(id).map(|entry| entry.path.clone())
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    pub fn clear(&self) {
        self.cars.clear();
    }
}
