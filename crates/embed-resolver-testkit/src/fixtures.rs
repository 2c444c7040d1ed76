//! Fake sites for end-to-end tests.
//!
//! A [`SiteFixture`] pairs a [`ProviderProfile`] with a [`MemoryHttp`] that
//! behaves like the site: embed pages carry sealed fields, and the resolver
//! endpoint opens the request, checks its signature and answers with a
//! sealed media URL.

use std::collections::BTreeMap;
use std::sync::Arc;

use embed_resolver::{
    BaseUrlCache, Delivery, EmbedField, FieldPattern, Part, ProviderProfile, Resolver,
    ResolverConfig, ResolverSpec, ServerListing, SignatureSpec,
};
use embed_resolver_core::{envelope, signature};
use embed_resolver_http::{HttpError, MemoryHttp, RecordedRequest};

/// Site root of every fixture.
pub const SITE: &str = "https://site.test";
/// Origin serving embed pages and the resolver endpoint.
pub const EMBED: &str = "https://embed.test";

/// Passphrase sealing embed-page fields.
pub const FIELD_KEY: &str = "field@2023@";
/// Passphrase sealing the request payload.
pub const REQUEST_KEY: &str = "request@2023@";
/// Passphrase sealing the response data.
pub const RESPONSE_KEY: &str = "response@2023@";
/// Secret prefix of the signature salt.
pub const SIGNATURE_SECRET: &str = "sig#";

/// Encrypt `text` for embedding in a fake page.
pub fn seal(text: &str, passphrase: &str) -> String {
    envelope::wrap(text.as_bytes(), passphrase).expect("encrypting an in-memory buffer cannot fail")
}

/// An embed page carrying sealed `idfile_enc` and `idUser_enc` assignments.
pub fn signed_embed_page(idfile: &str, id_user: &str) -> String {
    format!(
        "<html><script>\n  var idfile_enc = \"{}\";\n  var idUser_enc = '{}';\n</script></html>",
        seal(idfile, FIELD_KEY),
        seal(id_user, FIELD_KEY)
    )
}

/// A profile with the signed `idfile|idUser|timestamp` exchange.
pub fn signed_profile(embeds: Vec<String>) -> ProviderProfile {
    ProviderProfile {
        name: "signed".into(),
        base_url: SITE.into(),
        bouncer: false,
        episode: None,
        servers: ServerListing::Fixed { embeds },
        fields: vec![
            sealed_field("idfile", "idfile_enc"),
            sealed_field("idUser", "idUser_enc"),
        ],
        delivery: Delivery::Resolver(ResolverSpec {
            endpoint: "{origin}/api/source".into(),
            form_field: "data".into(),
            payload: vec![
                Part::Field("idfile".into()),
                Part::Field("idUser".into()),
                Part::Timestamp,
            ],
            delimiter: "|".into(),
            passphrase: REQUEST_KEY.into(),
            signature: Some(SignatureSpec {
                salt: vec![
                    Part::Literal(SIGNATURE_SECRET.into()),
                    Part::Field("idfile".into()),
                ],
            }),
            response_passphrase: RESPONSE_KEY.into(),
            aliases: BTreeMap::new(),
        }),
        referer: None,
    }
}

fn sealed_field(name: &str, variable: &str) -> EmbedField {
    EmbedField {
        name: name.into(),
        pattern: FieldPattern::Assignment(variable.into()),
        passphrase: Some(FIELD_KEY.into()),
    }
}

/// Answer `url` like a signed resolver endpoint serving `media`.
///
/// Requests with a bad signature or an unreadable payload get a failure
/// status, as real endpoints do.
pub fn signed_endpoint(http: &MemoryHttp, url: &str, media: &str) {
    let media = media.to_string();
    http.on_post(url, move |req| Ok(answer_signed(req, &media)));
}

fn answer_signed(req: &RecordedRequest, media: &str) -> String {
    let failure = |msg: &str| serde_json::json!({ "status": 0, "msg": msg }).to_string();

    let Some((ciphertext, sig)) = req.field("data").and_then(|d| d.split_once('|')) else {
        return failure("unsigned request");
    };
    let Ok(payload) = envelope::unwrap_str(ciphertext, REQUEST_KEY) else {
        return failure("unreadable payload");
    };
    let idfile = payload.split('|').next().unwrap_or_default();
    if !signature::verify(ciphertext, &format!("{}{}", SIGNATURE_SECRET, idfile), sig) {
        return failure("bad signature");
    }

    serde_json::json!({ "status": 1, "data": seal(media, RESPONSE_KEY) }).to_string()
}

/// A fake site and the profile that resolves it.
pub struct SiteFixture {
    pub http: Arc<MemoryHttp>,
    pub profile: ProviderProfile,
    /// Media URLs the site serves, one per working candidate.
    pub media: Vec<String>,
}

impl SiteFixture {
    /// One embed page and a signed resolver exchange.
    pub fn signed_resolver() -> Self {
        let http = Arc::new(MemoryHttp::new());
        let media = "https://cdn.test/hls/ep-1/master.m3u8".to_string();

        http.on_get(format!("{}/e/ep-1", EMBED), signed_embed_page("1234", "5678"));
        signed_endpoint(&http, &format!("{}/api/source", EMBED), &media);

        Self {
            http,
            profile: signed_profile(vec![format!("{}/e/{{episode}}", EMBED)]),
            media: vec![media],
        }
    }

    /// Three candidates; only the second page carries the sealed fields.
    pub fn three_servers_one_good() -> Self {
        let http = Arc::new(MemoryHttp::new());
        let media = "https://cdn.test/hls/good/master.m3u8".to_string();

        http.on_get(format!("{}/e/1", EMBED), "<html>this video was removed</html>");
        http.on_get(format!("{}/e/2", EMBED), signed_embed_page("42", "7"));
        http.on_get(
            format!("{}/e/3", EMBED),
            format!("var idfile_enc = \"{}\";", seal("43", FIELD_KEY)),
        );
        signed_endpoint(&http, &format!("{}/api/source", EMBED), &media);

        let embeds = (1..=3).map(|i| format!("{}/e/{}", EMBED, i)).collect();
        Self {
            http,
            profile: signed_profile(embeds),
            media: vec![media],
        }
    }

    /// Servers listed by an AJAX endpoint; the media URL is itself a sealed
    /// embed field.
    pub fn embedded_link() -> Self {
        let http = Arc::new(MemoryHttp::new());
        let media = vec![
            "https://cdn.test/files/ep-9.mp4".to_string(),
            "https://cdn.test/hls/ep-9/index.m3u8".to_string(),
        ];

        http.on_get(
            format!("{}/ajax/episode/servers?id=ep-9", SITE),
            serde_json::json!({
                "status": true,
                "html": format!(
                    "<div class=\"server\" data-link=\"{0}/embed/9a\">Vidstream</div>\
                     <div class=\"server\" data-link=\"{0}/embed/9b\">MegaUp</div>",
                    EMBED
                ),
            })
            .to_string(),
        );
        for (suffix, url) in ["9a", "9b"].iter().zip(&media) {
            http.on_get(
                format!("{}/embed/{}", EMBED, suffix),
                format!("jwplayer().setup({{ file: \"{}\" }});", seal(url, FIELD_KEY)),
            );
        }

        let profile = ProviderProfile {
            name: "embedded".into(),
            base_url: SITE.into(),
            bouncer: false,
            episode: None,
            servers: ServerListing::Page {
                url: "{base}/ajax/episode/servers?id={episode}".into(),
                form: Vec::new(),
                pattern: r#"data-link="(?P<url>[^"]+)">(?P<label>[^<]+)<"#.into(),
            },
            fields: vec![sealed_field("file", "file")],
            delivery: Delivery::Embedded {
                field: "file".into(),
            },
            referer: Some("{base}/".into()),
        };

        Self {
            http,
            profile,
            media,
        }
    }

    /// An unsigned exchange whose endpoint spells its status key `sucess`
    /// and reports the stream type.
    pub fn token_relay() -> Self {
        let http = Arc::new(MemoryHttp::new());
        let media = "https://cdn.test/play/7f3a".to_string();

        http.on_get(
            format!("{}/v/ep-3", EMBED),
            format!("<script>window.__token = \"{}\";</script>", seal("tok-991", FIELD_KEY)),
        );

        let served = media.clone();
        http.on_post(format!("{}/relay", EMBED), move |req| {
            let payload = req
                .field("q")
                .ok_or_else(|| HttpError::InvalidRequest("missing q".into()))
                .and_then(|q| {
                    envelope::unwrap_str(q, REQUEST_KEY)
                        .map_err(|e| HttpError::InvalidRequest(e.to_string()))
                })?;
            if payload != "tok-991:ep-3" {
                return Ok(r#"{"sucess": false, "msg": "bad token"}"#.to_string());
            }
            let data = serde_json::json!({ "file": served.as_str(), "type": "hls" }).to_string();
            Ok(serde_json::json!({ "sucess": 1, "data": seal(&data, RESPONSE_KEY) }).to_string())
        });

        let profile = ProviderProfile {
            name: "relay".into(),
            base_url: SITE.into(),
            bouncer: false,
            episode: None,
            servers: ServerListing::Fixed {
                embeds: vec![format!("{}/v/{{episode}}", EMBED)],
            },
            fields: vec![EmbedField {
                name: "token".into(),
                pattern: FieldPattern::Regex(r#"__token\s*=\s*"([^"]+)""#.into()),
                passphrase: Some(FIELD_KEY.into()),
            }],
            delivery: Delivery::Resolver(ResolverSpec {
                endpoint: "{origin}/relay".into(),
                form_field: "q".into(),
                payload: vec![Part::Field("token".into()), Part::EpisodeId],
                delimiter: ":".into(),
                passphrase: REQUEST_KEY.into(),
                signature: None,
                response_passphrase: RESPONSE_KEY.into(),
                aliases: BTreeMap::new(),
            }),
            referer: None,
        };

        Self {
            http,
            profile,
            media: vec![media],
        }
    }

    /// [`SiteFixture::signed_resolver`] behind a bouncer that redirects to
    /// the live mirror.
    pub fn bouncer() -> Self {
        let http = Arc::new(MemoryHttp::new());
        let media = "https://cdn.test/hls/mirror/master.m3u8".to_string();
        let mirror = "https://mirror3.test";

        http.redirect("https://go.site.test/", format!("{}/", mirror));
        http.on_get(format!("{}/embed/ep-5", mirror), signed_embed_page("900", "901"));
        signed_endpoint(&http, &format!("{}/api/source", mirror), &media);

        let mut profile = signed_profile(vec!["{base}/embed/{episode}".into()]);
        profile.name = "bounced".into();
        profile.base_url = "https://go.site.test/".into();
        profile.bouncer = true;

        Self {
            http,
            profile,
            media: vec![media],
        }
    }

    /// A resolver for this site with a private base-URL cache.
    pub fn resolver(&self) -> embed_resolver::Result<Resolver> {
        self.resolver_with(ResolverConfig::default())
    }

    /// [`SiteFixture::resolver`] with a custom configuration.
    pub fn resolver_with(&self, config: ResolverConfig) -> embed_resolver::Result<Resolver> {
        Ok(Resolver::new(self.profile.clone(), self.http.clone(), config)?
            .with_base_url_cache(Arc::new(BaseUrlCache::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embed_resolver::extract::Extractor;

    #[test]
    fn test_embed_page_fields_are_extractable() {
        let page = signed_embed_page("1234", "5678");
        let idfile = Extractor::assignment("idfile_enc").unwrap();
        let id_user = Extractor::assignment("idUser_enc").unwrap();

        let sealed = idfile.capture(&page).unwrap();
        assert_eq!(envelope::unwrap_str(sealed, FIELD_KEY).unwrap(), "1234");
        let sealed = id_user.capture(&page).unwrap();
        assert_eq!(envelope::unwrap_str(sealed, FIELD_KEY).unwrap(), "5678");
    }

    #[test]
    fn test_profiles_compile() {
        for fixture in [
            SiteFixture::signed_resolver(),
            SiteFixture::three_servers_one_good(),
            SiteFixture::embedded_link(),
            SiteFixture::token_relay(),
            SiteFixture::bouncer(),
        ] {
            assert!(fixture.resolver().is_ok(), "{}", fixture.profile.name);
        }
    }

    #[test]
    fn test_endpoint_rejects_bad_signature() {
        let http = MemoryHttp::new();
        signed_endpoint(&http, "https://x.test/api", "https://cdn.test/a.m3u8");

        let ciphertext = seal("1|2|3", REQUEST_KEY);
        let request = RecordedRequest {
            method: embed_resolver_http::Method::Post,
            url: "https://x.test/api".into(),
            form: vec![("data".into(), format!("{}|{}", ciphertext, "0".repeat(32)))],
            headers: Default::default(),
        };
        assert!(answer_signed(&request, "https://cdn.test/a.m3u8").contains("bad signature"));

        let good = signature::sign(&ciphertext, &format!("{}1", SIGNATURE_SECRET));
        let request = RecordedRequest {
            form: vec![("data".into(), format!("{}|{}", ciphertext, good))],
            ..request
        };
        assert!(answer_signed(&request, "https://cdn.test/a.m3u8").contains("\"status\":1"));
    }
}
