// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS authentication

use md5::compute as md5_compute;

use super::RouterOsConnection;
use crate::router::PortError;

impl RouterOsConnection {
    pub(crate) async fn login(&mut self, username: &str, password: &str) -> Result<(), PortError> {
        tracing::trace!("Attempting login for user: {}", username);
        // Try new login method first (RouterOS 6.43+)
        let reply = self
            .command(&[
                "/login".to_string(),
                format!("=name={username}"),
                format!("=password={password}"),
            ])
            .await?;

        if let Some(msg) = &reply.trap {
            if msg.contains("failure") || msg.contains("invalid") {
                tracing::trace!("Login failed with message: {}", msg);
                return Err(PortError::Login(msg.clone()));
            }
            tracing::debug!("New login method rejected, trying legacy method: {}", msg);
        } else if let Some(challenge_hex) = reply.ret {
            // Pre-6.43 routers answer the plain login with a challenge
            tracing::trace!("Challenge received, length: {}", challenge_hex.len());
            return self.legacy_login(username, password, &challenge_hex).await;
        } else {
            tracing::debug!("Login successful (new method)");
            return Ok(());
        }

        tracing::trace!("Requesting challenge for legacy login");
        let reply = self.command(&["/login".to_string()]).await?;
        let challenge_hex = reply
            .ret
            .ok_or_else(|| PortError::Login("No challenge 'ret' received".to_string()))?;
        self.legacy_login(username, password, &challenge_hex).await
    }

    async fn legacy_login(
        &mut self,
        username: &str,
        password: &str,
        challenge_hex: &str,
    ) -> Result<(), PortError> {
        let response = challenge_response(password, challenge_hex)?;
        let reply = self
            .command(&[
                "/login".to_string(),
                format!("=name={username}"),
                format!("=response={response}"),
            ])
            .await?;
        if let Some(msg) = reply.trap {
            return Err(PortError::Login(msg));
        }
        tracing::debug!("Login successful (legacy method)");
        Ok(())
    }
}

/// MD5 of `0 + password + challenge`, hex encoded with a `00` prefix
fn challenge_response(password: &str, challenge_hex: &str) -> Result<String, PortError> {
    let challenge = hex::decode(challenge_hex)
        .map_err(|e| PortError::Login(format!("Malformed challenge: {e}")))?;

    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(0u8);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(&challenge);
    let digest = md5_compute(&data);

    let mut response = String::from("00");
    response.push_str(&hex::encode(digest.0));
    Ok(response)
}
