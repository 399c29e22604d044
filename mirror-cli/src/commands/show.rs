//! Print one locally stored user.

use anyhow::Result;
use mirror_store::UserStore;
use mirror_types::{UserId, UserRecord};

/// Run the show command.
pub async fn run<St: UserStore + ?Sized>(store: &St, id: i64) -> Result<()> {
    match store.get_by_id(UserId::new(id)).await? {
        Some(user) => {
            print!("{}", render(&user));
            Ok(())
        }
        None => anyhow::bail!(
            "User {} not found in the local copy. Run 'usermirror refresh' first.",
            id
        ),
    }
}

fn render(user: &UserRecord) -> String {
    let address = &user.address;
    format!(
        "{name} (@{username})\n\
         \x20 ID:      {id}\n\
         \x20 Email:   {email}\n\
         \x20 Phone:   {phone}\n\
         \x20 Website: {website}\n\
         \x20 Address: {street}, {suite}, {city} {zipcode} ({lat}, {lng})\n\
         \x20 Company: {company}\n\
         \x20          \"{catch_phrase}\"\n",
        name = user.name,
        username = user.username,
        id = user.id,
        email = user.email,
        phone = user.phone,
        website = user.website,
        street = address.street,
        suite = address.suite,
        city = address.city,
        zipcode = address.zipcode,
        lat = address.geo.lat,
        lng = address.geo.lng,
        company = user.company.name,
        catch_phrase = user.company.catch_phrase,
    )
}
