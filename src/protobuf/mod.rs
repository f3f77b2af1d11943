//! Generated protobuf modules
//!
//! Includes the code prost generates from the Meshtastic schema subset under
//! `protos/`. Everything on the wire (ServiceEnvelope, MeshPacket, Data, User)
//! comes from here; field numbers match the upstream Meshtastic definitions so
//! frames remain bit-compatible with third-party nodes.

pub mod meshtastic {
    //! Generated Meshtastic protobuf types.
    //! build.rs compiles the .proto files; prost emits one file per package.
    //! The include is wrapped in a submodule with allow() attributes so unused
    //! portions of the generated API do not produce warnings.
    #[allow(dead_code, unused_imports, unused_variables, unused_mut)]
    #[allow(clippy::all)]
    #[allow(rustdoc::invalid_html_tags)]
    mod inner {
        include!(concat!(env!("OUT_DIR"), "/meshtastic.rs"));
    }
    pub use inner::*;
}
