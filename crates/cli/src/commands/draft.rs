use anyhow::Result;

use crate::draft::DraftStore;
use crate::print_json;

pub(crate) fn run_show(store: &DraftStore) -> Result<()> {
    print_json(&store.load()?)
}

pub(crate) fn run_clear(store: &DraftStore) -> Result<()> {
    if store.clear()? {
        println!("Draft cleared: {}", store.path().display());
    } else {
        println!("No draft to clear");
    }
    Ok(())
}
