//! Behavioural scenarios for the catalog-driven instance resources.

mod lifecycle;
