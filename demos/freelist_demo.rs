//! Interactive walkthrough of the free-list allocator.
//!
//! Run with `cargo run --example freelist_demo`. Prints the free-list
//! shape after each step so you can watch splitting and coalescing
//! happen; pauses between steps so you can inspect the process with
//! `pmap`/`htop` if you want to.

use std::io::Read;

use freelist_alloc::FreeList;

fn block_until_enter_pressed() {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
}

fn print_dump(label: &str, heap: &FreeList) {
    println!("[{label}] free blocks:");
    for block in heap.dump() {
        println!(
            "    addr={:#x} size_units={} next={:#x}",
            block.address, block.size_units, block.next_address
        );
    }
    println!(
        "    free_bytes={} block_count={}",
        heap.free_bytes(),
        heap.block_count()
    );
}

fn main() {
    env_logger::init();
    let mut heap = FreeList::new();

    println!("[1] Allocate 128 bytes");
    let first = heap.malloc(128);
    assert!(!first.is_null());
    print_dump("1", &heap);
    block_until_enter_pressed();

    println!("\n[2] Allocate 256 bytes");
    let second = heap.malloc(256);
    assert!(!second.is_null());
    print_dump("2", &heap);
    block_until_enter_pressed();

    println!("\n[3] Free both, watch them coalesce with the surrounding region");
    unsafe {
        heap.free(first);
        heap.free(second);
    }
    print_dump("3", &heap);
    block_until_enter_pressed();

    println!("\n[4] Allocate 384 bytes from the coalesced region");
    let third = heap.malloc(384);
    assert!(!third.is_null());
    print_dump("4", &heap);

    unsafe { heap.free(third) };
    heap.terminate();
    println!("\n[5] Terminated. Process exit will reclaim everything else.");
}
