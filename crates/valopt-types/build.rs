use std::env;
use std::fs;
use std::path::PathBuf;

use prost::Message;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_dir = "proto";
    let files = &["valopt/options.proto"];

    for f in files {
        println!("cargo:rerun-if-changed={proto_dir}/{f}");
    }

    #[allow(clippy::unwrap_used)]
    let base_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = base_path.join("file_descriptor_set.bin");

    let descriptors = protox::compile(files, [proto_dir])?;
    fs::write(&descriptor_path, descriptors.encode_to_vec())?;

    prost_build::Config::new().compile_fds(descriptors)?;

    Ok(())
}
