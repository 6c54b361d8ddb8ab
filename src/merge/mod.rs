pub mod venue_merge;
