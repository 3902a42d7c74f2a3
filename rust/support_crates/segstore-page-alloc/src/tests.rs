use crate::{align_up, vm, vm_region::VmRegion};

#[test]
fn test_align_up() {
    assert_eq!(align_up(0, 4096), 0);
    assert_eq!(align_up(1, 4096), 4096);
    assert_eq!(align_up(4096, 4096), 4096);
    assert_eq!(align_up(4097, 4096), 8192);
}

#[test]
fn test_page_size() {
    let page_size = vm::get_page_size();
    assert!(page_size.is_power_of_two());
    assert!(page_size >= 4096);
}

#[test]
fn test_reserve_commit_release() {
    let page_size = vm::get_page_size();
    let size = page_size * 4;
    let ptr = vm::reserve(size, page_size).expect("reserve");
    assert!(!ptr.is_null());
    assert!((ptr as usize).is_multiple_of(page_size));

    unsafe {
        vm::commit(ptr, size).expect("commit");
        let bytes = std::slice::from_raw_parts_mut(ptr as *mut u8, size);
        assert!(bytes.iter().all(|&b| b == 0));
        bytes[0] = 1;
        bytes[size - 1] = 2;
        vm::release(ptr, size, page_size).expect("release");
    }
}

#[test]
fn test_reserve_large_alignment() {
    let alignment = 4 * 1024 * 1024;
    for _ in 0..4 {
        let ptr = vm::reserve(alignment, alignment).expect("reserve");
        assert!((ptr as usize).is_multiple_of(alignment));
        unsafe { vm::release(ptr, alignment, alignment).expect("release") };
    }
}

#[test]
fn test_reserve_trims_unaligned_ends() {
    let page_size = vm::get_page_size();
    let alignment = 1024 * 1024;
    let size = page_size * 3;
    let mut kept = vec![];
    for _ in 0..16 {
        let ptr = vm::reserve(size, alignment).expect("reserve");
        assert!((ptr as usize).is_multiple_of(alignment));
        unsafe {
            vm::commit(ptr, size).expect("commit");
            (ptr as *mut u8).write_bytes(0x5A, size);
        }
        kept.push(ptr);
    }
    for ptr in kept {
        unsafe { vm::release(ptr, size, alignment).expect("release") };
    }
    assert_eq!(vm::get_page_size(), page_size);
}

#[test]
fn test_decommit_zeroes() {
    let page_size = vm::get_page_size();
    let region = VmRegion::reserve(page_size * 2, page_size).expect("reserve");
    let ptr = region.commit(page_size, page_size).expect("commit");
    unsafe { ptr.write_bytes(0xAB, page_size) };
    region.decommit(page_size, page_size).expect("decommit");

    let ptr = region.commit(page_size, page_size).expect("recommit");
    let bytes = unsafe { std::slice::from_raw_parts(ptr, page_size) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn test_region_bounds() {
    let page_size = VmRegion::page_size();
    let region = VmRegion::reserve(page_size * 3 + 1, page_size).expect("reserve");
    assert_eq!(region.size(), page_size * 4);
    assert!(region.contains(region.ptr() as usize));
    assert!(region.contains(region.ptr() as usize + region.size() - 1));
    assert!(!region.contains(region.ptr() as usize + region.size()));

    assert!(region.commit(page_size * 4, page_size).is_err());
    assert!(region.commit(1, page_size).is_err());
    assert!(region.commit(0, page_size + 1).is_err());
    assert!(region.commit(usize::MAX - page_size + 1, page_size).is_err());
    assert!(region.commit(0, page_size * 4).is_ok());
}

#[test]
fn test_region_rejects_bad_alignment() {
    let err = VmRegion::reserve(4096, 3000).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}
