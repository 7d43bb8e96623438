#[rocket::launch]
fn rocket() -> _ {
    hive::rocket()
}
