//! Attaches credentials according to the manifest's auth mode.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use connector_manifest::AuthMode;
use http::header::AUTHORIZATION;
use http::request::Builder;

use crate::credentials::Credential;

/// Where the credential ends up for one request.
pub(crate) enum AppliedAuth {
    Header(Builder),
    Query {
        builder: Builder,
        param: String,
        value: String,
    },
}

pub(crate) fn apply(mode: &AuthMode, credential: Option<&Credential>, builder: Builder) -> AppliedAuth {
    let Some(credential) = credential else {
        return AppliedAuth::Header(builder);
    };
    let secret = credential.secret();

    match mode {
        AuthMode::None => AppliedAuth::Header(builder),
        AuthMode::Bearer => AppliedAuth::Header(builder.header(AUTHORIZATION, format!("Bearer {secret}"))),
        AuthMode::Basic => {
            let pair = if secret.contains(':') {
                secret.to_owned()
            } else {
                format!("{secret}:")
            };
            AppliedAuth::Header(
                builder.header(AUTHORIZATION, format!("Basic {}", STANDARD.encode(pair))),
            )
        }
        AuthMode::Header { name } => AppliedAuth::Header(builder.header(name.as_str(), secret)),
        AuthMode::Query { param } => AppliedAuth::Query {
            builder,
            param: param.clone(),
            value: secret.to_owned(),
        },
    }
}
