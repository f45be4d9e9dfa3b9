/// Interactive token issuing
use crate::{
    error::GalleryResult,
    shell::{console::Console, render},
    store::Category,
    tokens::{
        discover_albums, normalize_phone, parse_album_selection, parse_validity_days, Album,
        IssuedToken, NewToken, TokenIssuer,
    },
};
use std::path::Path;
use tracing::warn;

/// Walk the operator through issuing one token
pub fn run<C: Console>(
    console: &mut C,
    issuer: &TokenIssuer,
    albums_dir: &Path,
) -> GalleryResult<IssuedToken> {
    for line in render::banner("NEW CLIENT TOKEN", 50) {
        console.say(&line);
    }

    let client = ask_client(console)?;
    let category = ask_category(console)?;
    let albums = ask_albums(console, &client, albums_dir)?;
    let phone = ask_phone(console, &client)?;
    let validity_days = ask_validity(console, issuer.default_validity_days())?;

    let issued = issuer.issue(NewToken {
        client,
        category,
        albums,
        phone,
        validity_days,
    })?;

    for line in render::render_issued(&issued) {
        console.say(&line);
    }
    Ok(issued)
}

fn ask_client<C: Console>(console: &mut C) -> GalleryResult<String> {
    loop {
        let client = console.prompt("Client name: ")?.trim().to_string();
        if !client.is_empty() {
            return Ok(client);
        }
        console.say("Client name is required.");
    }
}

fn ask_category<C: Console>(console: &mut C) -> GalleryResult<Category> {
    console.say("");
    console.say("Categories:");
    for (i, category) in Category::ALL.iter().enumerate() {
        console.say(&format!("{}. {}", i + 1, category));
    }

    let choice = console.prompt(&format!("Choose a category (1-{}): ", Category::ALL.len()))?;
    Ok(Category::from_choice(&choice))
}

fn ask_albums<C: Console>(console: &mut C, client: &str, albums_dir: &Path) -> GalleryResult<Vec<String>> {
    let albums = match discover_albums(albums_dir) {
        Ok(albums) => albums,
        Err(e) => {
            warn!("Album discovery in {:?} failed: {}", albums_dir, e);
            console.say(&format!("Could not list albums: {}", e));
            Vec::new()
        }
    };

    if albums.is_empty() {
        console.say("");
        console.say(&format!(
            "No album descriptors found in {}. Enter the album name by hand.",
            albums_dir.display()
        ));
        let manual = console.prompt("Album name (without .json, blank for all albums): ")?;
        let manual = manual.trim();
        return Ok(if manual.is_empty() {
            Vec::new()
        } else {
            vec![manual.to_string()]
        });
    }

    show_albums(console, &albums);

    loop {
        let input = console.prompt(&format!("\nWhich albums can {} access? ", client))?;
        if input.trim().is_empty() {
            console.say("Select at least one album (or '*' for all).");
            continue;
        }

        let selection = parse_album_selection(&input, &albums);
        for index in &selection.out_of_range {
            console.say(&format!("Index {} is not in the list.", index));
        }

        if !selection.is_empty() {
            return Ok(selection.albums);
        }
        console.say("No valid album was selected. Try again.");
    }
}

fn show_albums<C: Console>(console: &mut C, albums: &[Album]) {
    console.say("");
    console.say(&render::rule('-', 30));
    console.say("AVAILABLE ALBUMS");
    console.say(&render::rule('-', 30));
    for (i, album) in albums.iter().enumerate() {
        console.say(&format!("{:2}. {}  ({})", i + 1, album.title, album.slug));
    }
    console.say(&render::rule('-', 30));
    console.say("Enter numbers separated by commas to select several albums.");
    console.say("Use '*' for every album, or type album names.");
}

fn ask_phone<C: Console>(console: &mut C, client: &str) -> GalleryResult<String> {
    let input = console.prompt(&format!(
        "Phone for {} with country and area code (optional): ",
        client
    ))?;
    let phone = normalize_phone(&input);
    if phone.is_short {
        console.say("Number looks too short; it will be stored anyway.");
    }
    Ok(phone.digits)
}

fn ask_validity<C: Console>(console: &mut C, default_days: u32) -> GalleryResult<u32> {
    loop {
        let input = console.prompt(&format!("Validity in days (default {}): ", default_days))?;
        match parse_validity_days(&input, default_days) {
            Ok(days) => return Ok(days),
            Err(e) if e.is_retryable() => console.say(&e.to_string()),
            Err(e) => return Err(e),
        }
    }
}
