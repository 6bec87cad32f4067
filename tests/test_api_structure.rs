use verletlist_rs::{
    AccessError, BuildError, FullCsrList, GridError, HalfPaddedList, NeighborList, VerletList,
};

#[test]
fn test_lists_are_usable_as_trait_objects() {
    let positions = [[1.0, 1.0, 1.0], [1.5, 1.0, 1.0], [1.0, 1.9, 1.0]];
    let full = FullCsrList::new(positions.as_slice(), 0..3, 1.0, 1.0, [0.0; 3], [3.0; 3]).unwrap();
    let half =
        HalfPaddedList::new(positions.as_slice(), 0..3, 1.0, 1.0, [0.0; 3], [3.0; 3]).unwrap();

    let lists: [&dyn NeighborList; 2] = [&full, &half];
    assert_eq!(lists[0].total_neighbor(), 4);
    assert_eq!(lists[1].total_neighbor(), 2);
    assert_eq!(lists[0].max_neighbor(), 2);
    assert_eq!(
        lists[1].try_neighbor(1, 0),
        Err(AccessError::NeighborOutOfRange {
            particle: 1,
            index: 0,
            count: 0
        })
    );
}

#[test]
fn test_default_list_is_empty_and_unbuilt() {
    let list: VerletList<verletlist_rs::FullNeighborTag, verletlist_rs::PaddedLayout> =
        VerletList::default();
    assert!(!list.is_built());
    assert_eq!(list.num_particles(), 0);
}

#[test]
fn test_error_messages() {
    let err = BuildError::from(GridError::InvalidRadius(-2.0));
    assert!(err.to_string().contains("-2"));

    let err = BuildError::InvalidRange {
        begin: 4,
        end: 2,
        len: 10,
    };
    assert_eq!(err.to_string(), "Build range [4, 2) is invalid for 10 particles");
}
