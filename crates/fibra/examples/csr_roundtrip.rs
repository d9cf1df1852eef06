//! CSR round trip example
//!
//! This example demonstrates:
//! - Building a matrix from unordered inserts and packing it as CSR
//! - Walking the stored entries
//! - Zero-copy export of the CSR arrays
//! - Wrapping caller-owned arrays without copying
//! - Transposing into CSC
//!
//! Run with: cargo run --example csr_roundtrip -p fibra --features tracing
//!
//! Set `RUST_LOG=fibra_sparse=trace` to see the packer's per-level events.

use fibra::prelude::*;
use fibra::sparse::make_csr_borrowed;
use fibra::tracing_support::{init_tracing, TracingConfig};

fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::default())?;

    println!("=== fibra: CSR Round Trip Example ===\n");

    // 1. Insert in any order, then pack
    let a = Tensor::new("A", DataType::Float64, &[4, 4], Format::csr())?;
    let triples = [
        (3, 3, 8.0),
        (0, 0, 4.0),
        (2, 3, -1.0),
        (1, 1, 5.0),
        (0, 2, -3.0),
        (2, 0, -2.0),
    ];
    for (i, j, v) in triples {
        a.insert(&[i, j], v)?;
    }
    a.pack()?;
    println!("1. Packed tensor");
    print!("{a}");

    // 2. Zero-copy export
    println!("\n2. CSR arrays");
    {
        let csr = csr_arrays::<f64>(&a)?;
        println!("   rowptr: {:?}", csr.ptr());
        println!("   colidx: {:?}", csr.idx());
        println!("   values: {:?}", csr.values());
    }

    // 3. Caller-owned arrays
    println!("\n3. Borrowed CSR");
    let mut rowptr = vec![0, 2, 3, 5, 6];
    let mut colidx = vec![0, 2, 1, 0, 3, 3];
    let mut values = vec![4.0, -3.0, 5.0, -2.0, -1.0, 8.0];
    {
        let b = make_csr_borrowed("B", &[4, 4], &mut rowptr, &mut colidx, &mut values)?;
        println!("   equal values: {}", a.equals(&b));
        println!("   same handle:  {}", a == b);
    }
    println!("   caller arrays intact: {:?}", rowptr);

    // 4. Transpose into CSC
    println!("\n4. Transpose");
    let at = a.transpose_with("At", &[1, 0], Format::csc())?;
    let csc = csc_arrays::<f64>(&at)?;
    println!("   colptr: {:?}", csc.ptr());
    println!("   rowidx: {:?}", csc.idx());
    println!("   dense:\n{}", at.to_dense::<f64>()?);

    Ok(())
}
