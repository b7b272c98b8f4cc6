fn main() {
    idcard_form_lib::run()
}
