/// Token Issuing
///
/// Album discovery, selection parsing and creation of new client tokens.

pub mod albums;
pub mod issuer;

pub use albums::{discover_albums, parse_album_selection, Album, AlbumSelection};
pub use issuer::{
    generate_token_id, greeting, messaging_link, normalize_phone, parse_validity_days,
    IssuedToken, NewToken, PhoneNumber, TokenIssuer,
};
