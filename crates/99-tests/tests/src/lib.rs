//! Cross-crate tests for the CAPI registry.



#[cfg(test)]
mod lifecycle_stress;

#[cfg(test)]
mod invariants;

#[cfg(test)]
mod facade;
