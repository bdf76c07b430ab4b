//! Synthetic aftershock sequences drawn from a known Omori-Utsu law.

pub mod synthetic;
