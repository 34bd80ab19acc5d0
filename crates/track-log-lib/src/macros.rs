/// Builds a [`Slot`](crate::field::Slot) binding one field of a record struct.
///
/// ```ignore
/// slot!(Waypoint, elevation)
/// ```
macro_rules! slot {
    ($record:ty, $field:ident) => {
        $crate::field::Slot::<$record, _>::new(
            stringify!($field),
            |record: &$record| &record.$field,
            |record: &mut $record| &mut record.$field,
        )
    };
}
