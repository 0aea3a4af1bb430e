use nvram_core::persistence;
use nvram_core::{
    FlashStorage, FlashStorageConfig, MemoryStorage, NvramHeader, NvramSpace, SpaceTable,
    SpaceTableConfig, SpaceTableError, Storage, StorageError,
};
use nvram_shared::Blob;
use sequential_storage::mock_flash::{MockFlashBase, WriteCountCheck};

fn space(contents: &[u8]) -> NvramSpace {
    NvramSpace {
        contents: Blob::from(contents),
        ..NvramSpace::default()
    }
}

fn seed(allocated: &[u32], provisional: Option<u32>, spaces: &[u32]) -> MemoryStorage {
    let mut storage = MemoryStorage::new();
    let header = NvramHeader {
        allocated_indices: allocated.to_vec(),
        provisional_index: provisional,
        ..NvramHeader::default()
    };
    persistence::store_header(&mut storage, &header).expect("seed header");
    for &index in spaces {
        persistence::store_space(&mut storage, index, &space(b"seeded")).expect("seed space");
    }
    storage
}

fn open(storage: MemoryStorage) -> SpaceTable<MemoryStorage> {
    SpaceTable::open(storage, SpaceTableConfig::default()).expect("open")
}

fn stored_header(storage: &mut MemoryStorage) -> NvramHeader {
    persistence::load_header(storage).expect("stored header")
}

#[test]
fn crash_before_space_write_rolls_back_creation() {
    let table = open(seed(&[3, 5], Some(5), &[3]));
    assert_eq!(table.allocated_indices(), [3]);
    assert_eq!(table.header().provisional_index, None);

    let mut storage = table.into_storage();
    let header = stored_header(&mut storage);
    assert_eq!(header.allocated_indices, [3]);
    assert_eq!(header.provisional_index, None);
}

#[test]
fn crash_after_space_write_commits_creation() {
    let mut table = open(seed(&[3, 5], Some(5), &[3, 5]));
    assert_eq!(table.allocated_indices(), [3, 5]);
    assert_eq!(
        table.load_space(5).expect("committed space").contents.as_slice(),
        b"seeded"
    );

    let mut storage = table.into_storage();
    assert_eq!(stored_header(&mut storage).provisional_index, None);
}

#[test]
fn crash_before_data_removal_finishes_deletion() {
    let table = open(seed(&[3], Some(7), &[3, 7]));
    assert_eq!(table.allocated_indices(), [3]);
    assert!(table.storage().space_record(7).is_none());
    assert!(table.storage().space_record(3).is_some());
}

#[test]
fn crash_after_data_removal_finishes_deletion() {
    let table = open(seed(&[3], Some(7), &[3]));
    assert_eq!(table.allocated_indices(), [3]);

    let mut storage = table.into_storage();
    assert_eq!(stored_header(&mut storage).provisional_index, None);
}

#[test]
fn unreadable_provisional_space_stays_allocated() {
    let mut storage = seed(&[5], Some(5), &[5]);
    storage.fail_space_loads(5);

    let mut table = open(storage);
    assert_eq!(table.allocated_indices(), [5]);
    assert_eq!(
        table.load_space(5),
        Err(SpaceTableError::Storage(StorageError::Failure))
    );

    table.storage_mut().clear_faults();
    assert!(table.load_space(5).is_ok());
}

#[test]
fn failed_header_rewrite_does_not_block_open() {
    let mut storage = seed(&[5], Some(5), &[]);
    storage.fail_mutations_after(0);

    let table = open(storage);
    assert!(table.allocated_indices().is_empty());

    // The stored header still carries the marker; the next open repeats recovery.
    let mut storage = table.into_storage();
    storage.clear_faults();
    assert_eq!(stored_header(&mut storage).provisional_index, Some(5));
    let table = open(storage);
    assert!(table.allocated_indices().is_empty());
}

#[test]
fn failed_data_removal_blocks_open() {
    let mut storage = seed(&[], Some(7), &[7]);
    storage.fail_mutations_after(0);
    assert_eq!(
        SpaceTable::open(storage, SpaceTableConfig::default()).map(|_| ()),
        Err(SpaceTableError::Storage(StorageError::Failure))
    );
}

#[test]
fn power_loss_during_create_is_undone_on_reopen() {
    let mut storage = MemoryStorage::new();
    // Header write goes through, the space write does not.
    storage.fail_mutations_after(1);

    let mut table = open(storage);
    assert_eq!(
        table.create_space(9, &space(b"lost")),
        Err(SpaceTableError::Storage(StorageError::Failure))
    );
    assert!(!table.contains(9));

    let mut storage = table.into_storage();
    storage.clear_faults();
    let header = stored_header(&mut storage);
    assert_eq!(header.allocated_indices, [9]);
    assert_eq!(header.provisional_index, Some(9));

    let table = open(storage);
    assert!(!table.contains(9));
    assert!(table.storage().space_record(9).is_none());
}

#[test]
fn power_loss_before_commit_keeps_created_space() {
    let mut storage = MemoryStorage::new();
    // Provisional header and space data land, the committing header does not.
    storage.fail_mutations_after(2);

    let mut table = open(storage);
    table.create_space(9, &space(b"kept")).expect("create succeeds");

    let mut storage = table.into_storage();
    storage.clear_faults();
    assert_eq!(stored_header(&mut storage).provisional_index, Some(9));

    let mut table = open(storage);
    assert_eq!(
        table.load_space(9).expect("space").contents.as_slice(),
        b"kept"
    );
}

#[test]
fn power_loss_during_delete_is_finished_on_reopen() {
    let mut table = open(MemoryStorage::new());
    table.create_space(4, &space(b"doomed")).expect("create");
    // Header write goes through, the data removal does not.
    table.storage_mut().fail_mutations_after(1);
    assert_eq!(
        table.delete_space(4),
        Err(SpaceTableError::Storage(StorageError::Failure))
    );
    assert!(table.contains(4));

    let mut storage = table.into_storage();
    storage.clear_faults();
    assert!(storage.space_record(4).is_some());

    let table = open(storage);
    assert!(!table.contains(4));
    assert!(table.storage().space_record(4).is_none());
}

#[test]
fn excess_spaces_refuse_to_open() {
    let allocated: Vec<u32> = (0..33).collect();
    let storage = seed(&allocated, None, &[]);
    assert_eq!(
        SpaceTable::open(storage, SpaceTableConfig::default()).map(|_| ()),
        Err(SpaceTableError::TooManySpaces(32))
    );
}

#[test]
fn corrupt_header_refuses_to_open() {
    let mut storage = MemoryStorage::new();
    storage
        .store_header(&Blob::from(b"not a header"))
        .expect("raw header");
    assert_eq!(
        SpaceTable::open(storage, SpaceTableConfig::default()).map(|_| ()),
        Err(SpaceTableError::Storage(StorageError::Failure))
    );
}

#[test]
fn lifecycle_on_flash_survives_reopen() {
    type Flash = MockFlashBase<16, 4, 256>;

    let flash = Flash::new(WriteCountCheck::Twice, None, false);
    let storage = FlashStorage::new(flash, Flash::FULL_FLASH_RANGE, FlashStorageConfig::default());
    let mut table = SpaceTable::open(storage, SpaceTableConfig::default()).expect("open flash");
    table.create_space(1, &space(b"first")).expect("create 1");
    table.create_space(2, &space(b"second")).expect("create 2");
    table.delete_space(1).expect("delete 1");

    let mut updated = table.load_space(2).expect("load 2");
    updated.contents.assign(b"updated");
    table.store_space(2, &updated).expect("store 2");

    let flash = table.into_storage().into_inner();
    let storage = FlashStorage::new(flash, Flash::FULL_FLASH_RANGE, FlashStorageConfig::default());
    let mut table = SpaceTable::open(storage, SpaceTableConfig::default()).expect("reopen flash");
    assert_eq!(table.allocated_indices(), [2]);
    assert_eq!(
        table.load_space(2).expect("reload 2").contents.as_slice(),
        b"updated"
    );
    assert_eq!(
        table.storage_mut().load_space(1),
        Err(StorageError::NotFound)
    );
}
