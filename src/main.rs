use std::env;
use std::io::Read;

fn main() -> Result<(), Box<dyn std::error::Error>>
{
    let data: Vec<String> = env::args()
        .skip(1)
        .map(|f| {
            let mut file = std::fs::File::open(f)?;
            let mut s = String::new();
            file.read_to_string(&mut s)?;
            Ok(s)
        })
        .collect::<Result<_, std::io::Error>>()?;

    let context = protoreef::Context::parse(&data)?;

    println!("{:#?}", context);

    Ok(())
}
