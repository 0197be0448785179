//! Normalization around a chain of lazy unions.
//!
//! A union chain starts by upgrading its first container to a bitset
//! ([`upgrade_to_bitmap`]), ORs the remaining containers in lazily, and ends
//! with [`repair_after_lazy`], which restores an exact cardinality and the
//! canonical encoding for it.

use rbm_bitmap::{
    Container,
    container::{ARRAY_MAX_SIZE, SPAN},
};

/// Restores a container produced by lazy unions to its canonical form:
/// - unknown cardinality is recomputed;
/// - at most [`ARRAY_MAX_SIZE`] values become an array container;
/// - a full bitset becomes a single `[0, 65535]` run.
///
/// Any other bitset, and all non-bitset containers, are left unchanged.
pub fn repair_after_lazy(container: &mut Container) {
    let Container::Bitmap(bits) = container else {
        return;
    };
    let cardinality = match bits.known_cardinality() {
        Some(cardinality) => cardinality,
        None => bits.compute_cardinality(),
    };
    if cardinality <= ARRAY_MAX_SIZE {
        let array = bits.to_array_container();
        *container = Container::Array(array);
    } else if cardinality == SPAN {
        *container = Container::full();
    }
}

/// Returns the accumulator that starts a union chain.
///
/// Arrays and partial runs are expanded to a bitset. A full run is kept
/// as-is since no union can add to it, and a bitset is copied unchanged.
pub fn upgrade_to_bitmap(container: &Container) -> Container {
    match container {
        Container::Run(runs) if runs.is_full() => container.clone(),
        Container::Bitmap(_) => container.clone(),
        other => Container::Bitmap(other.to_bitmap_container()),
    }
}
