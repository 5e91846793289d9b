pub use scolarite_models::complaints::*;
