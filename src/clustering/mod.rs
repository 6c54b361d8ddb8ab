pub mod duplicate_clustering;
