pub use scolarite_models::requests::*;
