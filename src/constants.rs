pub const PAGE_SIZE: i64 = 6;

pub const MAX_LENGTH_EMAIL: usize = 254;
pub const MAX_LENGTH_NAME: usize = 150;
pub const MAX_LENGTH_TITLE: usize = 200;
pub const MAX_LENGTH_INGREDIENT: usize = 200;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
pub const SHOPPING_LIST_HEADER: &str =
    "     ヽ( `･ω･)人( ^ω^)人( ﾟДﾟ)人(´∀｀)人(・∀・ )人(^Д^ )ﾉ";
pub const SHOPPING_LIST_FOOTER: &str = "      Foodgram  ◦°˚ヽ(*・_・)ノ˚°◦";
