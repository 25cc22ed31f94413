use std::env;
use std::fs;
use std::path::PathBuf;

use protox::Compiler;

/// Compiles the sandbox fixture protos into descriptor sets for the test
/// suites. No Rust code is generated; tests drive the engine through
/// `DynamicMessage` over the decoded pools.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let includes = ["proto", "../valopt-types/proto"];
    let fixtures = &[
        ("valopt/sandbox/sandbox.proto", "sandbox_descriptor_set.bin"),
        (
            "valopt/sandbox/mismatched.proto",
            "mismatched_descriptor_set.bin",
        ),
    ];

    for (file, _) in fixtures {
        println!("cargo:rerun-if-changed=proto/{file}");
    }
    println!("cargo:rerun-if-changed=../valopt-types/proto/valopt/options.proto");

    #[allow(clippy::unwrap_used)]
    let base_path = PathBuf::from(env::var("OUT_DIR").unwrap());

    for (file, descriptor_set) in fixtures {
        // `encode_file_descriptor_set` retains custom (extension) options,
        // unlike `file_descriptor_set().encode_to_vec()`, which drops them
        // because `prost_types::FieldOptions` cannot hold extension fields.
        let mut compiler = Compiler::new(includes)?;
        compiler.include_imports(true).open_file(file)?;
        fs::write(
            base_path.join(descriptor_set),
            compiler.encode_file_descriptor_set(),
        )?;
    }

    Ok(())
}
