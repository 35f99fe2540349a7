//! Origin-server signatures on message headers.
//!
//! The server that accepts a message from its own user signs the header with
//! its routing key. Any later hop verifies it by resolving the sender's
//! address, then the routing record that address points at.

use hashpost_lib::encoding::to_base64;
use hashpost_lib::message::Header;
use hashpost_lib::{PublicKey, ResolverService, Result, RoutingConfig};

/// Sign `header` as this server. An existing server signature is kept.
pub fn sign_header(header: &mut Header, routing: &RoutingConfig) -> Result<()> {
    if !header.server_signature.is_empty() {
        return Ok(());
    }

    let digest = header.transit_digest()?;
    let signature = routing.private_key.sign(&digest)?;
    header.server_signature = to_base64(signature);
    Ok(())
}

/// Check the server signature against the origin server's key as published
/// in the directory. Any failure, including lookup failures, is `false`.
pub async fn verify_header(header: &Header, resolver: &ResolverService) -> bool {
    match origin_key(header, resolver).await {
        Some(key) => check(header, &header.server_signature, &key, "server"),
        None => false,
    }
}

/// Check the client signature against the sender's key as published in the
/// directory, not the key the header itself carries.
pub async fn verify_client_signature(header: &Header, resolver: &ResolverService) -> bool {
    match resolver.resolve_address(&header.from.addr).await {
        Ok(info) => check(header, &header.client_signature, &info.public_key, "client"),
        Err(e) => {
            tracing::trace!(from = %header.from.addr, error = %e, "sender lookup failed");
            false
        }
    }
}

async fn origin_key(header: &Header, resolver: &ResolverService) -> Option<PublicKey> {
    let address = match resolver.resolve_address(&header.from.addr).await {
        Ok(info) => info,
        Err(e) => {
            tracing::trace!(from = %header.from.addr, error = %e, "sender lookup failed");
            return None;
        }
    };
    match resolver.resolve_routing(&address.routing_id).await {
        Ok(routing) => Some(routing.public_key),
        Err(e) => {
            tracing::trace!(routing = %address.routing_id, error = %e, "origin lookup failed");
            None
        }
    }
}

fn check(header: &Header, signature: &str, key: &PublicKey, which: &'static str) -> bool {
    match header.verify_signature(signature, key) {
        Ok(()) => true,
        Err(e) => {
            tracing::trace!(signature = which, error = %e, "header signature rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashpost_lib::message::{HeaderCatalog, HeaderRecipient, HeaderSender};
    use hashpost_lib::test_utils::TestDirectory;
    use hashpost_lib::Hash;

    fn header(dir: &TestDirectory, from: &str, to: &str) -> Header {
        let sender = dir.user(from);
        Header {
            from: HeaderSender {
                addr: sender.address.hash(),
                public_key: sender.keys.public_key.clone(),
                proof_of_work: None,
            },
            to: HeaderRecipient {
                addr: dir.user(to).address.hash(),
            },
            catalog: HeaderCatalog {
                size: 512,
                checksum: Hash::new("catalog"),
            },
            client_signature: String::new(),
            server_signature: String::new(),
        }
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let dir = TestDirectory::seeded(&["john!", "jane!"]).await;
        let mut h = header(&dir, "john!", "jane!");
        assert!(!verify_header(&h, &dir.resolver).await);

        sign_header(&mut h, &dir.routing).unwrap();
        assert!(verify_header(&h, &dir.resolver).await);
    }

    #[tokio::test]
    async fn test_existing_signature_kept() {
        let dir = TestDirectory::seeded(&["john!", "jane!"]).await;
        let mut h = header(&dir, "john!", "jane!");
        sign_header(&mut h, &dir.routing).unwrap();
        let first = h.server_signature.clone();

        sign_header(&mut h, &RoutingConfig::generate().unwrap()).unwrap();
        assert_eq!(h.server_signature, first);
    }

    #[tokio::test]
    async fn test_wrong_server_key() {
        let dir = TestDirectory::seeded(&["john!", "jane!"]).await;
        let mut h = header(&dir, "john!", "jane!");
        sign_header(&mut h, &RoutingConfig::generate().unwrap()).unwrap();
        assert!(!verify_header(&h, &dir.resolver).await);
    }

    #[tokio::test]
    async fn test_client_signature_uses_directory_key() {
        let dir = TestDirectory::seeded(&["john!", "jane!"]).await;
        let mut h = header(&dir, "john!", "jane!");
        h.sign_client(&dir.user("john!").keys.private_key).unwrap();
        assert!(verify_client_signature(&h, &dir.resolver).await);

        // Self-consistent header from an impostor key
        let impostor = hashpost_lib::KeyPair::generate(hashpost_lib::KeyType::Ed25519).unwrap();
        h.from.public_key = impostor.public_key.clone();
        h.sign_client(&impostor.private_key).unwrap();
        h.verify_client().unwrap();
        assert!(!verify_client_signature(&h, &dir.resolver).await);
    }
}
