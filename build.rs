fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/adequacy.proto");

    // Protobuf code is only needed by the remote layer.
    if std::env::var_os("CARGO_FEATURE_REMOTE").is_some() {
        tonic_build::compile_protos("proto/adequacy.proto")?;
    }

    Ok(())
}
