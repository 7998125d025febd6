pub use tandem_core::codec;
pub use tandem_core::model::{Role, SessionId, ShareLink};

pub mod model {
    pub use tandem_core::model::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use tandem_relay::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use tandem_peer::*;
}
