//! Stock concrete protocols shipped with the dispatch layer.

mod compare;
mod inspect;
