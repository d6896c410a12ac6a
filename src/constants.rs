/// Casing variants of the `none` algorithm name.
pub const NONE_ALGORITHM_VARIANTS: [&str; 4] = ["none", "None", "NONE", "nOnE"];

/// Header serializations tried for every `none` variant. `{alg}` is replaced
/// with the variant.
pub const HEADER_FORMAT_VARIANTS: [&str; 3] = [
    r#"{"typ":"JWT","alg":"{alg}"}"#,
    r#"{"alg":"{alg}","typ":"JWT"}"#,
    r#"{"alg":"{alg}"}"#,
];

pub const ALGORITHM_PLACEHOLDER: &str = "{alg}";

pub const NULL_BYTE: char = '\0';

/// Marker appended after injected null bytes.
pub const EYE_CATCHER: &str = "0W45pz4p";

/// Whole-token values with only empty segments.
pub const EMPTY_TOKENS: [&str; 2] = ["...", "....."];

pub const HEADER_ALGORITHM: &str = "alg";
pub const HEADER_JWK: &str = "jwk";
pub const HEADER_KEY_ID: &str = "kid";
pub const HEADER_JWK_SET_URL: &str = "jku";

/// Default upper bound on candidate secret length for HMAC secret discovery.
pub const DEFAULT_HMAC_MAX_KEY_LENGTH: usize = 26;

/// Secrets commonly left in place by frameworks, tutorials and CI fixtures.
pub const COMMON_SECRETS: &str = "secret
Secret
SECRET
secretkey
secret_key
secret-key
supersecret
changeme
changeit
password
Password1
123456
1234567890
qwerty
admin
key
jwt
jwt_secret
jwt-secret
jwtsecret
your-256-bit-secret
your-384-bit-secret
your-512-bit-secret
my_secret_key
mysecretkey
mysecret
shhhhh
default
test
testing
development
hmac
token
access
auth
s3cr3t";
